//! Environment source: `DRAFTSMITH_<SECTION>__<KEY>` overrides.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub const ENV_PREFIX: &str = "DRAFTSMITH";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("pipeline.banned_title_terms")
            .with_list_parse_key("convergence.priority_keys")
            .with_list_parse_key("context.extensions")
            .with_list_parse_key("context.directories"),
    )
}
