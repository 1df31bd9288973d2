/// terminal and file logging for drivers and examples (simplelog behind the `log` facade)
pub mod logger;
/// order-preserving parallel map over independent items (rayon)
pub mod parallel;
