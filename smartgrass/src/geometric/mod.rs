pub mod aoi;
pub mod attribution;
pub mod road;
pub mod vegetation;
