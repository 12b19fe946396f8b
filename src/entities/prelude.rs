pub use super::categorias::Entity as Categorias;
pub use super::dispositivos::Entity as Dispositivos;
pub use super::users::Entity as Users;
