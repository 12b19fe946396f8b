pub mod prelude;

pub mod categorias;
pub mod dispositivos;
pub mod users;
