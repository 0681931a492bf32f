mod test_convert_properties;
mod test_resize_properties;
