//! Route handlers. Handlers only translate HTTP to and from the [`Analyst`](compliance_ai::Analyst).

pub mod analyze;
pub mod status;
