//! Stock widgets built on the element tree.

pub mod button;
pub mod label;

pub use button::{ButtonState, button_new};
pub use label::label_new;
