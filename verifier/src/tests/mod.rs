
mod restrictions;
mod sources;
