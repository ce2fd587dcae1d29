mod analysis;
mod sections;
