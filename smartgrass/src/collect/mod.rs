pub mod global_variables;
pub mod imagery;
pub mod toll;
