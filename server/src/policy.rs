use weft_shared::{Body, Credentials, Identity, LinkAddress};

/// Decides who may link to what. Rejections carry the reason sent back to
/// the subscriber.
pub trait LinkPolicy: Send + Sync {
    /// Called for every `link` / `sync` request before the link is opened
    fn authorize(&self, address: &LinkAddress, identity: &Identity) -> Result<(), String> {
        let _ = (address, identity);
        Ok(())
    }

    /// Turns the body of an `auth` envelope into an identity. By default
    /// any credentials naming a subject are accepted: either a bare string,
    /// or an object with a `subject` string.
    fn authenticate(&self, credentials: &Body) -> Result<Identity, String> {
        let value = credentials.value().ok_or("credentials required")?;
        let subject = value
            .as_str()
            .or_else(|| value.get("subject").and_then(|subject| subject.as_str()))
            .ok_or("credentials name no subject")?;
        Ok(Identity::Authenticated(Credentials::new(
            subject,
            credentials.clone(),
        )))
    }
}

/// Authorizes every link, and authenticates any subject
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenPolicy;

impl LinkPolicy for OpenPolicy {}
