/// Inline keyboard made of URL buttons (one per row).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkKeyboard {
    pub buttons: Vec<LinkButton>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: url::Url,
}

impl LinkKeyboard {
    pub fn new(buttons: Vec<LinkButton>) -> Self {
        Self { buttons }
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_inline_keyboards: bool,
}
