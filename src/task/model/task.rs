use super::action::Action;

#[derive(Clone, Debug, Default)]
pub struct Task {
    pub name: String,
    pub comment: Option<String>,
    pub prerequisites: Vec<String>,
    pub actions: Vec<Action>,
    pub invoked: bool,
}

impl Task {
    pub(crate) fn new(name: impl Into<String>, comment: Option<String>) -> Self {
        Self {
            name: name.into(),
            comment,
            ..Self::default()
        }
    }

    /// Appends prerequisites and, if given, an action. Never resets `invoked`.
    pub fn enhance<I, S>(&mut self, prereqs: I, action: Option<Action>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites.extend(prereqs.into_iter().map(Into::into));
        if let Some(action) = action {
            self.actions.push(action);
        }
        self
    }

    pub fn add_action(&mut self, action: Action) -> &mut Self {
        self.enhance(std::iter::empty::<String>(), Some(action))
    }

    /// First comment wins; later declarations never overwrite it.
    pub(crate) fn add_comment(&mut self, comment: Option<String>) {
        if self.comment.is_none() {
            self.comment = comment;
        }
    }
}
