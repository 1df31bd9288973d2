/// critical activation energy: synthetic oracle, shooting oracle, sweep over q
pub mod neutral_stability_examples;
/// steady profile, fundamental mode, carpet of |H|
pub mod normal_modes_examples;
