use crate::Body;

/// Credentials presented through an `auth` envelope and accepted by the peer
#[derive(Clone, Debug, PartialEq)]
pub struct Credentials {
    subject: String,
    body: Body,
}

impl Credentials {
    pub fn new<S: Into<String>>(subject: S, body: Body) -> Self {
        Self {
            subject: subject.into(),
            body,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// The authentication principal attached to a link
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(Credentials),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(credentials) => Some(credentials.subject()),
        }
    }

    /// The body an `auth` envelope carries to present this identity
    pub fn auth_body(&self) -> Body {
        match self {
            Identity::Anonymous => Body::Absent,
            Identity::Authenticated(credentials) => credentials.body().clone(),
        }
    }
}
