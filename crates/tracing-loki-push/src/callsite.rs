use compact_str::{CompactString, format_compact};
use loki_push::CallSite;
use std::panic::Location;
use tracing::Metadata;

/// Determines the function, file and line an event is attributed to.
///
/// Resolution never fails: when nothing usable is known the resolver returns
/// [`CallSite::unknown`].
pub trait CallSiteResolver: Send + Sync + 'static {
    /// Resolve the call site of an event with `metadata`, emitted inside the span
    /// named `span` if any.
    fn resolve(&self, metadata: &Metadata<'_>, span: Option<&str>) -> CallSite;
}

/// Resolves call sites from event metadata.
///
/// The function is the name of the enclosing span. Events outside of any span are
/// attributed to `<module>_module`, `<module>` being the last segment of the
/// module path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

/// Attributes every event to [`CallSite::unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl CallSiteResolver for DefaultResolver {
    fn resolve(&self, metadata: &Metadata<'_>, span: Option<&str>) -> CallSite {
        let (Some(file), Some(line)) = (metadata.file(), metadata.line()) else {
            return CallSite::unknown();
        };
        let function = match span {
            Some(name) => CompactString::from(name),
            None => metadata
                .module_path()
                .map(module_function)
                .unwrap_or_default(),
        };
        CallSite::new(function, file, line)
    }
}

impl CallSiteResolver for NoopResolver {
    fn resolve(&self, _metadata: &Metadata<'_>, _span: Option<&str>) -> CallSite {
        CallSite::unknown()
    }
}

/// Call site of a `#[track_caller]` location.
///
/// A location carries no function name, the file stem stands in for the module.
pub(crate) fn from_location(location: &Location<'_>) -> CallSite {
    let file = location.file();
    let stem = file
        .rsplit(['/', '\\'])
        .next()
        .and_then(|name| name.split('.').next())
        .filter(|stem| !stem.is_empty());
    let function = stem.map(|stem| format_compact!("{stem}_module"));
    CallSite::new(function.unwrap_or_default(), file, location.line())
}

fn module_function(module_path: &str) -> CompactString {
    let module = module_path.rsplit("::").next().unwrap_or(module_path);
    format_compact!("{module}_module")
}
