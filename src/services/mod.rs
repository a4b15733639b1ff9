pub mod collection;
pub mod import;
pub mod providers;
pub mod sharing;
pub mod wishlist;

pub use collection::CollectionService;
pub use sharing::SharingService;
pub use wishlist::WishlistService;
