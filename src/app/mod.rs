pub mod accounts_use_case;
pub mod content_use_case;
pub mod visibility;

pub use accounts_use_case::AccountsUseCase;
pub use content_use_case::ContentUseCase;
pub use visibility::VisibilityEngine;
