mod machine;

pub use machine::{
    ConfirmRequest, ConfirmationModal, InfoLine, ModalPhase, ModalView, Settlement,
    CONFIRMING_LABEL, CONFIRM_LABEL,
};
