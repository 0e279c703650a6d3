pub mod products;
pub mod users;

pub use products::Entity as Products;
pub use users::Entity as Users;
