//! Limits applied by the router and handlers.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of users one results-grid request may list.
pub const MAX_GRID_ROWS: usize = 200;
