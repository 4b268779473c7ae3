//! Run driver tests.


/// `Machine` setup, image placement and runs.
pub mod machine;
