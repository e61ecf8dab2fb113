//! Loom & Lens Common Library
//!
//! CLIと対話スタジオで共有される型・カタログ・状態マシン（I/Oなし）

pub mod types;
pub mod catalog;
pub mod error;
pub mod selection;
pub mod prompts;
pub mod workflow;

pub use types::{
    GeneratedImage, ImageData, ImageOrigin, ModelKind, ModelOption, OptionInfo, PoseOption, PresentationMode,
    SettingOption, StyleOption,
};
pub use catalog::Catalog;
pub use error::{Error, Result};
pub use selection::{
    available_poses, can_generate, reduce, PoseAvailability, SelectionAction, SelectionState,
    MAX_POSES,
};
pub use prompts::{
    build_pose_prompt, plan_batch, plan_edit, Attachment, AttachmentRole, BatchPlan, EditPlan,
    PoseTask, PromptPosition, SynthesisRequest,
};
pub use workflow::{EditSession, View, Workflow};
