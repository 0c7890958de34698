use crate::frontend::StructuralError;

/// Freshness of a derived view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Clean,
    Dirty,
    Error,
}

/// The output of one derived view plus its state.
///
/// A failed recomputation keeps the last good output and records the error.
#[derive(Debug, PartialEq)]
pub struct DerivedView<T> {
    output: Option<T>,
    state: ViewState,
    error: Option<StructuralError>,
}

impl<T> Default for DerivedView<T> {
    fn default() -> Self {
        Self {
            output: None,
            state: ViewState::Clean,
            error: None,
        }
    }
}

impl<T> DerivedView<T> {
    /// Marks a clean view as stale; an errored view stays in error until it recovers.
    pub fn mark_dirty(&mut self) {
        if self.state == ViewState::Clean {
            self.state = ViewState::Dirty;
        }
    }

    pub fn succeed(&mut self, output: Option<T>) {
        self.output = output;
        self.state = ViewState::Clean;
        self.error = None;
    }

    /// Swaps the output without touching the state, e.g. after a display switch.
    pub fn replace_output(&mut self, output: T) {
        self.output = Some(output);
    }

    pub fn fail(&mut self, error: StructuralError) {
        self.state = ViewState::Error;
        self.error = Some(error);
    }

    pub fn output(&self) -> Option<&T> {
        self.output.as_ref()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn error(&self) -> Option<&StructuralError> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.state == ViewState::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structural_error() -> StructuralError {
        disview_lang::parse("x = (").unwrap_err()
    }

    #[test]
    fn test_transitions() {
        let mut view = DerivedView::<u32>::default();
        assert_eq!(view.state(), ViewState::Clean);

        view.mark_dirty();
        assert_eq!(view.state(), ViewState::Dirty);
        view.succeed(Some(1));
        assert_eq!(view.state(), ViewState::Clean);

        view.mark_dirty();
        view.fail(structural_error());
        assert_eq!(view.state(), ViewState::Error);
        assert_eq!(view.output(), Some(&1));

        view.mark_dirty();
        assert_eq!(view.state(), ViewState::Error);
        view.fail(structural_error());
        assert!(view.is_error());
        assert_eq!(view.output(), Some(&1));

        view.succeed(Some(2));
        assert_eq!(view.state(), ViewState::Clean);
        assert_eq!(view.error(), None);
        assert_eq!(view.output(), Some(&2));
    }
}
