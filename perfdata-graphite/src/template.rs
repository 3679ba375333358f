//! Naming templates that map a host/service to its Graphite path.
//!
//! Icinga's Graphite writer stores performance data under a configurable
//! prefix. The resolver fills the same placeholders the writer uses and
//! appends `.perfdata.<selector>`.

use crate::sanitize::sanitize_path;

/// Default template for host checks.
pub const DEFAULT_HOST_TEMPLATE: &str = "icinga2.$host.name$.host.$host.check_command$";

/// Default template for service checks.
pub const DEFAULT_SERVICE_TEMPLATE: &str =
    "icinga2.$host.name$.services.$service.name$.$service.check_command$";

const HOST_NAME: &str = "$host.name$";
const SERVICE_NAME: &str = "$service.name$";
const HOST_CHECK_COMMAND: &str = "$host.check_command$";
const SERVICE_CHECK_COMMAND: &str = "$service.check_command$";

/// Expands the host and service templates into query paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResolver {
    host_template: String,
    service_template: String,
}

impl TemplateResolver {
    /// Create a resolver from the two templates.
    pub fn new(host_template: impl Into<String>, service_template: impl Into<String>) -> Self {
        Self {
            host_template: host_template.into(),
            service_template: service_template.into(),
        }
    }

    /// The template used for host checks.
    pub fn host_template(&self) -> &str {
        &self.host_template
    }

    /// The template used for service checks.
    pub fn service_template(&self) -> &str {
        &self.service_template
    }

    /// Resolve the query path for a host or service.
    ///
    /// Names are sanitized before substitution. `selector` is appended
    /// verbatim after `.perfdata.`; callers sanitize metric names in it
    /// themselves since it may contain `*` or a `{a,b}` list.
    pub fn resolve(
        &self,
        host_name: &str,
        service_name: &str,
        check_command: &str,
        is_host_check: bool,
        selector: &str,
    ) -> String {
        let host_name = sanitize_path(host_name);
        let check_command = sanitize_path(check_command);

        let prefix = if is_host_check {
            self.host_template
                .replace(HOST_NAME, &host_name)
                .replace(HOST_CHECK_COMMAND, &check_command)
        } else {
            let service_name = sanitize_path(service_name);
            self.service_template
                .replace(HOST_NAME, &host_name)
                .replace(SERVICE_NAME, &service_name)
                .replace(SERVICE_CHECK_COMMAND, &check_command)
                .replace(HOST_CHECK_COMMAND, &check_command)
        };

        format!("{}.perfdata.{}", prefix, selector)
    }
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_TEMPLATE, DEFAULT_SERVICE_TEMPLATE)
    }
}
