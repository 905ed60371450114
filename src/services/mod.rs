pub mod catalog;
pub mod checkout;
pub mod consultations;
pub mod entitlements;
pub mod verification;

pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use consultations::ConsultationService;
pub use entitlements::EntitlementService;
pub use verification::PaymentVerifier;
