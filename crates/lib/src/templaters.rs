pub mod placeholder;
pub mod raw;

use std::sync::Arc;

use sqruff_lib_core::errors::SQLFluffUserError;
use sqruff_lib_core::templaters::TemplatedFile;

use crate::Formatter;
use crate::core::config::FluffConfig;

/// Turns raw file content into a [`TemplatedFile`] — the source<->templated
/// slice map the rest of the pipeline reasons about. Concrete strategies
/// plug in here; they do not get to define a templating language, only how
/// the slice map for one is built.
pub trait Templater: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(
        &self,
        in_str: &str,
        f_name: &str,
        config: &FluffConfig,
        formatter: &Option<Arc<dyn Formatter>>,
    ) -> Result<TemplatedFile, SQLFluffUserError>;
}

pub static TEMPLATERS: &[&dyn Templater] = &[&raw::RawTemplater, &placeholder::PlaceholderTemplater];
