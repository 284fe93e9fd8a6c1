pub mod branch;
pub mod department;
pub mod region;
pub mod shop;
pub mod user;

pub use branch::Branch;
pub use department::Department;
pub use region::Region;
pub use shop::Shop;
pub use user::User;
