use crate::HandlerError;
use model::ResponseData;
use uuid::Uuid;

/// Key of the generated id in the response data, read with `Fn::GetAtt <Resource>.UUID`.
pub const UUID_ATTRIBUTE: &str = "UUID";

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Result<Uuid, HandlerError>;
}

/// Random (v4) ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<Uuid, HandlerError> {
        Ok(Uuid::new_v4())
    }
}

pub fn uuid_response(generator: &dyn IdGenerator) -> Result<ResponseData, HandlerError> {
    let id: Uuid = generator.generate()?;

    Ok(ResponseData::from([(
        UUID_ATTRIBUTE.to_string(),
        id.hyphenated().to_string(),
    )]))
}
