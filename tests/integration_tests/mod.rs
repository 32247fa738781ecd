mod confined_shelf;
