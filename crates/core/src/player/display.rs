use crate::{PracticeError, Result};

/// Host window capable of fullscreen presentation.
pub trait DisplayHost {
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self) -> Result<()>;
    fn exit_fullscreen(&mut self) -> Result<()>;
}

/// Display without a real window; tracks the requested mode only.
#[derive(Debug, Clone)]
pub struct HeadlessDisplay {
    supported: bool,
    fullscreen: bool,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            supported: true,
            fullscreen: false,
        }
    }

    /// A display that refuses every fullscreen request.
    pub fn without_fullscreen() -> Self {
        Self {
            supported: false,
            fullscreen: false,
        }
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayHost for HeadlessDisplay {
    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        if !self.supported {
            return Err(PracticeError::Fullscreen("not supported".to_string()));
        }
        self.fullscreen = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        self.fullscreen = false;
        Ok(())
    }
}
