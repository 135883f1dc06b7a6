//! Association metrics for nominal (categorical) data

mod contingency;
mod tschuprows;

pub use contingency::NanStrategy;
pub use tschuprows::{tschuprows_t, tschuprows_t_matrix, TschuprowsT, TschuprowsTConfig};
