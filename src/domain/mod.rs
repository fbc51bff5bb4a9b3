pub mod price;
pub mod purchase;
pub mod track;
