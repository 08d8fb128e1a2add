pub mod draft;
pub mod plan;
pub mod quota;
pub mod template;
pub mod validation;
pub mod variable;
