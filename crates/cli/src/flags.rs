use clap::ValueEnum;
use doctree_inference::InferenceMode;

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum InferenceModeFlag {
    Http,
    Stub,
}

impl InferenceModeFlag {
    pub(crate) const fn as_domain(self) -> InferenceMode {
        match self {
            InferenceModeFlag::Http => InferenceMode::Http,
            InferenceModeFlag::Stub => InferenceMode::Stub,
        }
    }
}
