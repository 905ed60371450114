pub mod consultation_request;
pub mod contract_template;
pub mod download;
pub mod purchase;

pub use consultation_request::Entity as ConsultationRequest;
pub use contract_template::Entity as ContractTemplate;
pub use download::Entity as Download;
pub use purchase::Entity as Purchase;
