//! Core orchestration layer for rainlint.
//!
//! Editors and other hosts talk to rainlint through two pieces: the
//! [`Rainlint`] engine, which answers per-document requests, and the
//! [`initialize`] / [`dispose`] pair, which registers the engine's providers
//! with a [`Host`] and tears them down again.

use std::fmt;
use std::path::Path;

use rainlint_config::Config;
use rainlint_format::Diagnostic;
use rainlint_ops::colors::{color_presentation, document_colors, ColorInfo, ColorNotation, Rgba};
use rainlint_ops::completion::{complete, CompletionItem};
use rainlint_ops::folding::{folding_ranges, FoldingRange};
use rainlint_ops::formatter::format_document;
use rainlint_ops::refresh::{on_save, RefreshError, RefreshOutcome, SkinEngine};
use rainlint_ops::{Operations, Validator};
use tracing::{debug, info};

/// Language identifier the providers are registered for.
pub const LANGUAGE_ID: &str = "rainmeter";

/// Capabilities a host can register.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProviderKind {
    Diagnostics,
    Completion,
    Color,
    Folding,
    Formatting,
    AutoRefresh,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Diagnostics => "diagnostics",
            ProviderKind::Completion => "completion",
            ProviderKind::Color => "color",
            ProviderKind::Folding => "folding",
            ProviderKind::Formatting => "formatting",
            ProviderKind::AutoRefresh => "auto-refresh",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by the host for one registration.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RegistrationId(pub u64);

/// Editor-side registry of providers.
pub trait Host {
    fn register(&mut self, kind: ProviderKind, language: &str) -> RegistrationId;
    fn unregister(&mut self, id: RegistrationId);
}

/// A registration that must be released on shutdown.
#[derive(Debug, Eq, PartialEq)]
#[must_use = "registrations leak unless passed to `dispose`"]
pub struct Disposable {
    pub kind: ProviderKind,
    pub id: RegistrationId,
}

/// Register every provider enabled by `config`.
///
/// The auto-refresh listener is only registered when
/// `refresh.auto_refresh_on_save` is set.
pub fn initialize(host: &mut dyn Host, config: &Config) -> Vec<Disposable> {
    let mut kinds = vec![
        ProviderKind::Diagnostics,
        ProviderKind::Completion,
        ProviderKind::Color,
        ProviderKind::Folding,
        ProviderKind::Formatting,
    ];
    if config.refresh.auto_refresh_on_save {
        kinds.push(ProviderKind::AutoRefresh);
    }

    kinds
        .into_iter()
        .map(|kind| {
            let id = host.register(kind, LANGUAGE_ID);
            debug!(provider = %kind, id = id.0, "registered provider");
            Disposable { kind, id }
        })
        .collect()
}

/// Release registrations in reverse registration order.
pub fn dispose(host: &mut dyn Host, disposables: Vec<Disposable>) {
    for disposable in disposables.into_iter().rev() {
        host.unregister(disposable.id);
        debug!(provider = %disposable.kind, id = disposable.id.0, "unregistered provider");
    }
}

/// Entry point for higher-level consumers (CLI, editor adapters).
pub struct Rainlint {
    ops: Operations,
}

impl Rainlint {
    pub fn bootstrap(config: Config) -> Self {
        info!(root = %config.project.root.display(), "rainlint bootstrapped");
        Self {
            ops: Operations::new(config),
        }
    }

    pub fn operations(&self) -> &Operations {
        &self.ops
    }

    pub fn config(&self) -> &Config {
        self.ops.config()
    }

    pub fn diagnostics(&self, text: &str, document_path: &Path) -> Vec<Diagnostic> {
        Validator::new(self.config()).validate(text, document_path)
    }

    pub fn completions(&self, line_text: &str) -> Vec<CompletionItem> {
        complete(line_text)
    }

    pub fn colors(&self, text: &str) -> Vec<ColorInfo> {
        document_colors(text)
    }

    pub fn color_presentation(&self, color: Rgba, notation: ColorNotation) -> String {
        color_presentation(color, notation)
    }

    pub fn folding(&self, text: &str) -> Vec<FoldingRange> {
        folding_ranges(text)
    }

    pub fn format(&self, text: &str) -> String {
        format_document(text)
    }

    /// Handle a save notification for `path`.
    pub fn saved(&self, path: &Path, engine: &dyn SkinEngine) -> Result<RefreshOutcome, RefreshError> {
        on_save(path, &self.config().refresh, engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rainlint_test_support::test_config;

    #[derive(Default)]
    struct RecordingHost {
        next: u64,
        active: Vec<(RegistrationId, ProviderKind)>,
        released: Vec<RegistrationId>,
    }

    impl Host for RecordingHost {
        fn register(&mut self, kind: ProviderKind, language: &str) -> RegistrationId {
            assert_eq!(language, LANGUAGE_ID);
            self.next += 1;
            let id = RegistrationId(self.next);
            self.active.push((id, kind));
            id
        }

        fn unregister(&mut self, id: RegistrationId) {
            self.active.retain(|(active, _)| *active != id);
            self.released.push(id);
        }
    }

    #[test]
    fn initialize_registers_all_providers() {
        let mut host = RecordingHost::default();
        let disposables = initialize(&mut host, &test_config());

        let kinds: Vec<_> = disposables.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ProviderKind::Diagnostics,
                ProviderKind::Completion,
                ProviderKind::Color,
                ProviderKind::Folding,
                ProviderKind::Formatting,
                ProviderKind::AutoRefresh,
            ]
        );
        assert_eq!(host.active.len(), 6);
        dispose(&mut host, disposables);
    }

    #[test]
    fn auto_refresh_follows_setting() {
        let mut config = test_config();
        config.refresh.auto_refresh_on_save = false;
        let mut host = RecordingHost::default();
        let disposables = initialize(&mut host, &config);

        assert!(disposables
            .iter()
            .all(|d| d.kind != ProviderKind::AutoRefresh));
        dispose(&mut host, disposables);
    }

    #[test]
    fn dispose_releases_in_reverse_order() {
        let mut host = RecordingHost::default();
        let disposables = initialize(&mut host, &test_config());
        let mut expected: Vec<_> = disposables.iter().map(|d| d.id).collect();
        expected.reverse();

        dispose(&mut host, disposables);
        assert!(host.active.is_empty());
        assert_eq!(host.released, expected);
    }

    #[test]
    fn engine_answers_document_requests() {
        let engine = Rainlint::bootstrap(test_config());
        let text = "[Rainmeter]\nUpdate = 1000\n[Variables]\nColor=255,0,0\n";

        assert!(engine.diagnostics(text, Path::new("/tmp/a.ini")).is_empty());
        assert_eq!(engine.colors(text).len(), 1);
        assert_eq!(engine.folding(text).len(), 2);
        assert!(engine.format(text).contains("Update=1000"));
        assert!(!engine.completions("StringAlign=").is_empty());
    }
}
