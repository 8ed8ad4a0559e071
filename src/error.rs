use thiserror::Error;

use crate::export::ExportError;
use crate::net::NetError;
use crate::state::edit::EditError;
use crate::state::page::PageError;
use crate::state::session::SessionError;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Net(#[from] NetError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
