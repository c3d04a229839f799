//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# simlink server configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# bind_address = "0.0.0.0"   # IPv4 or IPv6 literal
# port = 7410                # 1-65535

[logging]
# level = "INFO"             # DEBUG, INFO, WARNING, ERROR
# RUST_LOG, when set, takes precedence over this level.
"##
    .to_string()
}
