#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod NeutralStability;
#[allow(non_snake_case)]
pub mod NormalModes;
#[allow(non_snake_case)]
pub mod Utils;
