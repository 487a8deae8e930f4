pub mod beta_handlers;
pub mod cover_letter_handlers;
pub mod job_handlers;
pub mod profile_handlers;
pub mod scrape_handlers;
pub mod system_handlers;

pub use beta_handlers::*;
pub use cover_letter_handlers::*;
pub use job_handlers::*;
pub use profile_handlers::*;
pub use scrape_handlers::*;
pub use system_handlers::*;
