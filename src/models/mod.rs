//! Records persisted through the adapter and the forms that create them.

mod conversation;
mod ids;
mod issue;
mod matches;
mod profile;
mod property;
mod rating;

pub use conversation::{Conversation, Message, MessageBody, Participant};
pub use ids::{ConversationId, IssueId, MatchId, MessageId, ProfileId, PropertyId, RatingId};
pub use issue::{
    InternalNote, Issue, IssueCategory, IssueMessage, IssuePriority, IssueStatus, RaiseIssueInput,
    StatusChange,
};
pub use matches::{
    Match, Party, PetRequest, PetRequestStatus, TenancyStatus, ViewingPreference,
};
pub use profile::{
    normalize_email, AgencyOnboarding, AgencyProfile, Certifications, EpcRating, Identity,
    IdentityInput, LandlordOnboarding, LandlordProfile, OmbudsmanScheme, OnboardingInput,
    Profile, RenterInterest, RenterOnboarding, RenterProfile, RenterSituation, RenterStatus,
    UserType,
};
pub use property::{
    Address, Compliance, Furnishing, PetType, PetsPolicy, Property, PropertyInput,
};
pub use rating::{Rating, RatingCategory, RatingInput};
