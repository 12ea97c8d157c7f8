pub mod assessment;
pub mod domain;
pub mod media;
pub mod observation;
pub mod record;
