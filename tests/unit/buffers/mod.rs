mod test_tensor_buffer;
