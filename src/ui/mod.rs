mod central;
mod dialogs;
mod side;
mod statistics;
mod top;

pub use central::central_panel;
pub use dialogs::dialogs;
pub use side::side_panel;
pub use statistics::statistics_panel;
pub use top::top_panel;
