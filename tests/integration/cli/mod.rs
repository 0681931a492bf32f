mod test_roiprep_cli;
