pub mod delivery;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metadata;
pub mod pipeline;
pub mod platform;
pub mod selector;
pub mod validator;

pub use delivery::{Channel, ChatId, DeliveryCoordinator, DeliveryPhase, DeliverySession, NoticeId};
pub use engine::{ResolutionEngine, Strategy, ValidatedResult};
pub use error::{ChannelError, DeliveryError, ResolveError, SelectionError, StrategyError};
pub use ledger::{UsageLedger, UsageSnapshot};
pub use metadata::{QualityConstraint, ResolutionRequest, ResolutionResult, StrategyFailure};
pub use pipeline::{Outcome, Pipeline};
pub use platform::{classify, Classified, Platform};
pub use selector::{Choice, ChoiceOption, ChoiceToken, QualitySelector};
pub use validator::ResultValidator;
