pub(crate) mod civilian;
pub(crate) mod institutional;
pub(crate) mod languages;
pub(crate) mod military;
