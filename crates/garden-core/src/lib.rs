//! Garden planning pipeline for shelter vegetable gardens.
//!
//! ```text
//! "Tomatoes:50:4;Lettuce:25:2"
//!         |
//!    existing::parse_existing_crops
//!         |
//!    allocate::free_space --> allocate::recommend_crops   (or ranking::rank_by_predicted_yield)
//!         |
//!    schedule::generate_schedule --> schedule::annotate_with_forecast
//!    diagram::render_diagram
//! ```
//!
//! The pipeline functions are pure. Weather, yield prediction, and the
//! experimental allocation/text models are injected collaborators with an
//! explicit `Unavailable` variant; see [`planner::Planner`].

pub mod allocate;
pub mod combined;
pub mod crops;
pub mod diagram;
pub mod existing;
pub mod ml;
pub mod password;
pub mod planner;
pub mod ranking;
pub mod schedule;
pub mod token;
pub mod weather;
