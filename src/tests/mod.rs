mod app;
mod notes;
