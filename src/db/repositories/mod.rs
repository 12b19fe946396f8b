pub mod categoria;
pub mod dispositivo;
pub mod user;
