pub mod movement;
pub mod product;
pub mod user;

pub use movement::*;
pub use product::*;
pub use user::*;
