mod normalization;
mod title_filter;
