pub mod constants;
pub mod distribution;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use distribution::{correlation_p_value, student_t_two_sided_p};
pub use filename::{default_output_path, TableFormat};
pub use progress::ProgressReporter;
